//! Name generation utilities

use crate::components::Name;
use rand::Rng;

/// Generate a random name for a human-like agent
pub fn generate_name<R: Rng + ?Sized>(rng: &mut R) -> Name {
    let given = GIVEN_NAMES[rng.gen_range(0..GIVEN_NAMES.len())];
    let family = FAMILY_NAMES[rng.gen_range(0..FAMILY_NAMES.len())];

    Name::new(given, family)
}

// Frontier-flavoured name lists
static GIVEN_NAMES: &[&str] = &[
    "Abel", "Ada", "Bram", "Cass", "Dell", "Edda", "Fenn", "Greer", "Hale", "Ilse", "Jory", "Kit",
    "Lark", "Mabel", "Nash", "Orla", "Pim", "Quill", "Rook", "Sable", "Tam", "Uma", "Vick",
    "Wren", "Yara", "Zeke",
];

static FAMILY_NAMES: &[&str] = &[
    "Ashdown", "Barrow", "Colter", "Drummond", "Eastwick", "Farrow", "Grange", "Hollis",
    "Ironside", "Jessop", "Kettle", "Lowry", "Marsh", "Nettle", "Oakes", "Pryce", "Quarry",
    "Redfern", "Stroud", "Thatcher", "Underhill", "Vance", "Whitlock", "Yardley",
];

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generate_name() {
        let mut rng = StdRng::seed_from_u64(42);
        let name = generate_name(&mut rng);

        assert!(!name.given.is_empty());
        assert!(!name.family.is_empty());
    }

    #[test]
    fn test_name_variety() {
        let mut rng = StdRng::seed_from_u64(7);
        let names: Vec<Name> = (0..100).map(|_| generate_name(&mut rng)).collect();

        let unique_given: std::collections::HashSet<_> = names.iter().map(|n| &n.given).collect();
        let unique_family: std::collections::HashSet<_> = names.iter().map(|n| &n.family).collect();

        assert!(unique_given.len() > 10);
        assert!(unique_family.len() > 10);
    }
}

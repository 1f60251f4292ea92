// ============================================================
// Layer 3 — Diacritic Equivalence Classes
// ============================================================
// Groups of characters a Vietnamese typist confuses with each
// other: a base letter plus every tone/shape variant of it.
// The noise generator swaps a character for another member of
// its own class to manufacture a realistic typo.
//
// Invariants:
//   - classes are disjoint
//   - no class is empty

use std::collections::HashMap;

use crate::domain::error::SpellError;

/// The Vietnamese inventory, base letter first.
const VIETNAMESE: &[&[char]] = &[
    &['a', 'á', 'à', 'ả', 'ã', 'ạ', 'â', 'ấ', 'ầ', 'ẩ', 'ẫ', 'ậ', 'ă', 'ắ', 'ằ', 'ẳ', 'ẵ', 'ặ'],
    &['o', 'ó', 'ò', 'ỏ', 'õ', 'ọ', 'ô', 'ố', 'ồ', 'ổ', 'ỗ', 'ộ', 'ơ', 'ớ', 'ờ', 'ở', 'ỡ', 'ợ'],
    &['e', 'é', 'è', 'ẻ', 'ẽ', 'ẹ', 'ê', 'ế', 'ề', 'ể', 'ễ', 'ệ'],
    &['u', 'ú', 'ù', 'ủ', 'ũ', 'ụ', 'ư', 'ứ', 'ừ', 'ử', 'ữ', 'ự'],
    &['i', 'í', 'ì', 'ỉ', 'ĩ', 'ị'],
    &['y', 'ý', 'ỳ', 'ỷ', 'ỹ', 'ỵ'],
    &['d', 'đ'],
];

/// A validated set of disjoint equivalence classes.
#[derive(Debug, Clone)]
pub struct DiacriticClasses {
    /// Character → index of the class it belongs to
    class_of: HashMap<char, usize>,
}

impl DiacriticClasses {
    /// Validate and index a custom set of classes.
    pub fn new(classes: Vec<Vec<char>>) -> Result<Self, SpellError> {
        let mut class_of = HashMap::new();

        for (id, class) in classes.iter().enumerate() {
            if class.is_empty() {
                return Err(SpellError::EquivalenceClass(format!("class {id} is empty")));
            }
            for &c in class {
                if let Some(previous) = class_of.insert(c, id) {
                    return Err(SpellError::EquivalenceClass(format!(
                        "{c:?} belongs to both class {previous} and class {id}"
                    )));
                }
            }
        }

        Ok(Self { class_of })
    }

    /// The built-in Vietnamese accent/diacritic inventory.
    pub fn vietnamese() -> Result<Self, SpellError> {
        Self::new(VIETNAMESE.iter().map(|class| class.to_vec()).collect())
    }

    /// Index of the class `c` belongs to, if any.
    pub fn class_of(&self, c: char) -> Option<usize> {
        self.class_of.get(&c).copied()
    }
}

// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe the corrector's world:
// documents, encoded sentences, diacritic equivalence classes,
// the hyperparameter signature a checkpoint is keyed by, and
// the error taxonomy every other layer reports through.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits

// A loaded corpus document
pub mod document;

// An encoded sentence (vocabulary indices)
pub mod sentence;

// Vietnamese diacritic equivalence classes
pub mod diacritics;

// Hyperparameter signature that names a checkpoint
pub mod signature;

// Typed error taxonomy
pub mod error;

// Core abstractions (traits) that other layers implement
pub mod traits;

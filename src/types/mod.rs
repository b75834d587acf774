pub mod structure_definition;
pub mod terminology;

pub use structure_definition::{
    BASE_DEFINITION_PREFIX, ElementBase, ElementBinding, ElementDefinition, ElementList, ElementType,
    StructureDefinition,
};
pub use terminology::{CodeSystem, Concept, ConceptSet, ValueSet, ValueSetCompose};

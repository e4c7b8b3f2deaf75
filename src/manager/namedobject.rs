use serde::{
    Serialize,
    Deserialize
};

/// The `name` field every registered JSON definition carries; the rest of
/// the object is left to the type-specific parser.
#[derive(Clone, Serialize, Deserialize)]
pub struct NamedJsonObject {
    name: String
}


impl NamedJsonObject {
    pub fn name(&self) -> &str {
        &self.name
    }
}

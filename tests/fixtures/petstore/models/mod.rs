use serde::{Deserialize, Serialize};

/// swag:ans getPet 200
///
/// A pet in the store
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    pub id: u64,
    /// Display name
    pub pet_name: String,
    pub tags: Vec<String>,
    pub born_at: Option<chrono::DateTime<chrono::Utc>>,
    pub parent: Option<Box<Pet>>,
    #[serde(skip)]
    pub secret: String,
    internal: u32,
}

/// swag:req createPet
///
/// The pet to add
#[derive(Deserialize)]
pub struct NewPet {
    pub name: String,
    pub tags: Vec<String>,
}

/// swag:ans getPet 404
#[derive(Debug, Default, Serialize)]
pub struct ApiError {
    pub code: i32,
    pub message: String,
}

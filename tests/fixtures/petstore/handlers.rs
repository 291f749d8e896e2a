use crate::models::{ApiError, NewPet, Pet};
use serde::Deserialize;

pub struct PetHandlers;

impl PetHandlers {
    /// swag:route listPets GET /pets pets
    ///
    /// List pets
    /// Returns every pet in the store.
    pub fn list_pets(&self) -> Vec<Pet> {
        Vec::new()
    }

    /// swag:route createPet POST /pets pets
    ///
    /// Add a pet
    pub fn create_pet(&self, _pet: NewPet) {}

    /// swag:route getPet GET /pets/{id} pets
    ///
    /// Find a pet by ID
    pub fn get_pet(&self, _id: u64) -> Result<Pet, ApiError> {
        Err(ApiError::default())
    }

    /// swag:route deletePet DELETE /pets/:id pets admin
    pub fn delete_pet(&self, _id: u64) {}

    /// swag:route tracePets TRACE /pets
    pub fn trace_pets(&self) {}
}

/// swag:req listPets
#[derive(Deserialize)]
pub struct ListPetsQuery {
    /// Maximum number of results
    pub limit: u32,
    #[serde(rename = "tag")]
    pub tag_filter: String,
    #[serde(skip)]
    pub trace: bool,
}

/// swag:ans listPets 200
///
/// All pets
pub type PetList = Vec<Pet>;

/// swag:req deletePet
///
/// Why the pet is removed
#[derive(Deserialize)]
pub struct DeletePet {
    pub reason: String,
}

pub mod identify;
pub mod organize;
pub mod profile;

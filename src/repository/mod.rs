pub mod flats;
pub mod table_service;
pub mod tenants;

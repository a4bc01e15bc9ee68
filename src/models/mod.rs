pub mod organization;
pub mod vacancy;

pub mod ground;
pub mod heat_transfer;
pub mod materials;

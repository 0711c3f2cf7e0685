pub mod company;
pub mod price;
pub mod table;

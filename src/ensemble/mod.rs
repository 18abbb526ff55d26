pub mod heat_bath;

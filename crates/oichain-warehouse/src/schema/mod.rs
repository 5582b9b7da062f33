pub mod common_de;
pub mod option_chain;

pub mod checkout;
pub mod cli;

pub mod elapsed;
pub mod guard;
pub mod spinner;

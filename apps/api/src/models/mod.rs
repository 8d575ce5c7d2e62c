pub mod case;
pub mod document;
pub mod fee;
pub mod reference;

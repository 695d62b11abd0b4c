//! Page-level flows: the logic behind the login and product forms, free of
//! any rendering so both the browser front end and the CLI can drive it.

pub mod login;
pub mod products;

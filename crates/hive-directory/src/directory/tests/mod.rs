mod common;
mod enrollment;
mod validation;

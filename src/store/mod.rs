// Data access layer: one module per entity, one async function per
// operation. Every function takes the shared pool and runs parameterized
// statements only; dynamic pieces (search predicates, partial updates) are
// built from fixed fragments and allow-lists, never from caller identifiers.
pub mod batches;
pub mod courses;
pub mod enrollments;
pub mod lessons;
pub mod modules;
pub mod students;
pub mod users;

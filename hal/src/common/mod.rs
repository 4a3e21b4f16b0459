pub mod console;
pub(crate) mod pagetable;

pub mod collect_dead_letters;
pub mod worker;

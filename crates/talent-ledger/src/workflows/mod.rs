pub mod check_ins;

pub mod test_dqn;
pub mod test_env;

//! Pool configuration

mod pool_config;

pub use pool_config::{
    ClusterConfig, Credentials, PoolConfig, PoolSizing, SingleNodeConfig, Target, WaitPolicy,
};

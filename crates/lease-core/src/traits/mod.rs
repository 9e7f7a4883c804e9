//! Backend capability traits

mod connection_factory;

pub use connection_factory::ConnectionFactory;

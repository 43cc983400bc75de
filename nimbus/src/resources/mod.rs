//! Terraform resources for the Nimbus platform, grouped by service

pub mod cidr;

pub mod dbaas;
pub mod iaas;
pub mod loadbalancer;
pub mod objectstorage;
pub mod ske;
pub mod secretsmanager;

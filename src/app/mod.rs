// Application layer: concrete pipelines wired from domain ports and core algorithms.

pub mod pipelines;

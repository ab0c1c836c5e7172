mod acsf;
mod gather;
mod pooling;

pub mod prospectus;

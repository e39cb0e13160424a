pub mod date_dim;

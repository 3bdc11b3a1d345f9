pub mod porter;

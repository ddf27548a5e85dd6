pub mod gdv;

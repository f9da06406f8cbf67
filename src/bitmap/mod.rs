pub mod id_set;

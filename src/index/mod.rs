pub mod facet_index;

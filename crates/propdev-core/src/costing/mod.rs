pub mod build_cost;

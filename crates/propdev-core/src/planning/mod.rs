pub mod pd_route;

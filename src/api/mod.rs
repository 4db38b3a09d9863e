use rocket::Route;

mod candidates;
mod common;
mod election;
mod voting;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(candidates::routes());
    routes.extend(election::routes());
    routes.extend(voting::routes());
    routes
}

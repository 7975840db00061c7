use rocket::Route;

mod exports;
mod files;
mod manual_results;
mod tabulation;
mod write_ins;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(exports::routes());
    routes.extend(files::routes());
    routes.extend(manual_results::routes());
    routes.extend(tabulation::routes());
    routes.extend(write_ins::routes());
    routes
}

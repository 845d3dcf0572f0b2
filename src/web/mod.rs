pub mod admin;
pub mod error;
pub mod movies;
pub mod petitions;
pub mod reviews;

/// Configures the web app by adding services from each web file.
///
/// @see https://docs.rs/actix-web/4.0.1/actix_web/struct.App.html#method.configure
pub fn configure(conf: &mut actix_web::web::ServiceConfig) {
    // Route resolution will stop at the first match.
    admin::configure(conf);
    movies::configure(conf);
    reviews::configure(conf);
    petitions::configure(conf);
}

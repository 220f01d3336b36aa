use axum::extract::State;
use axum::response::Html;

use crate::http::state::AppState;

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let paths = &state.config.paths;
    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Marketplace</title>\n<link rel=\"stylesheet\" href=\"{static_path}/css/main.css\">\n</head>\n\
         <body>\n<h1>Marketplace</h1>\n<p>Find professionals and post jobs.</p>\n\
         <p><a href=\"{api}/v1/status\">API status</a></p>\n</body>\n</html>\n",
        static_path = paths.static_url_path,
        api = paths.api_prefix,
    ))
}

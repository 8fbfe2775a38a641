use leptos::prelude::*;
use webdemo::App;

fn main() {
    leptos::mount::mount_to_body(|| view! { <App /> })
}

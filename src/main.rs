//! Buckshot Duel entry point
//!
//! Handles platform-specific initialization and starts the render loop and
//! the single async game sequence.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{HtmlCanvasElement, MouseEvent, TouchEvent};

    use buckshot_duel::assets::{self, AssetStore};
    use buckshot_duel::consts::{CANVAS_H, CANVAS_W};
    use buckshot_duel::device_to_world;
    use buckshot_duel::render::canvas::{CanvasSurface, RenderLoop};
    use buckshot_duel::scene::Scene;
    use buckshot_duel::session::{ClickQueue, GameSession, ReplayChoice};
    use buckshot_duel::settings::Settings;

    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    pub async fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Buckshot Duel starting...");

        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");

        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .expect("no canvas")
            .dyn_into()
            .expect("not a canvas");

        // fixed logical resolution; CSS scales the element
        canvas.set_width(CANVAS_W as u32);
        canvas.set_height(CANVAS_H as u32);

        let settings = Settings::load();
        settings.save();

        let mut assets = AssetStore::new();
        assets::load_all(&mut assets).await;
        let assets = Rc::new(RefCell::new(assets));

        let scene = Rc::new(RefCell::new(Scene::new()));
        let surface = CanvasSurface::new(&canvas).expect("no 2d context");
        let render_loop = RenderLoop::new(scene.clone(), surface);

        let clicks = ClickQueue::new();
        setup_input_handlers(&canvas, clicks.clone());

        let seed = js_sys::Date::now() as u64;
        let rng = Pcg32::seed_from_u64(seed);
        log::info!("Game initialized with seed: {}", seed);

        let mut session = GameSession::new(scene, assets, clicks, &settings, rng);
        render_loop.start();

        wasm_bindgen_futures::spawn_local(async move {
            loop {
                let winner = session.run().await;
                log::info!("Winner: {winner:?}");
                match session.offer_replay().await {
                    ReplayChoice::Again => session.reset(),
                    ReplayChoice::Quit => {
                        render_loop.stop();
                        log::info!("Session ended");
                        break;
                    }
                }
            }
        });

        log::info!("Buckshot Duel running!");
    }

    fn setup_input_handlers(canvas: &HtmlCanvasElement, clicks: ClickQueue) {
        // Mouse click
        {
            let clicks = clicks.clone();
            let canvas_clone = canvas.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                let rect = canvas_clone.get_bounding_client_rect();
                let scale_x = CANVAS_W / rect.width() as f32;
                let scale_y = CANVAS_H / rect.height() as f32;
                let x = (event.client_x() as f32 - rect.left() as f32) * scale_x;
                let y = (event.client_y() as f32 - rect.top() as f32) * scale_y;
                clicks.push(device_to_world(x, y));
            });
            let _ = canvas
                .add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Touch start
        {
            let canvas_clone = canvas.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                event.prevent_default();
                if let Some(touch) = event.touches().get(0) {
                    let rect = canvas_clone.get_bounding_client_rect();
                    let scale_x = CANVAS_W / rect.width() as f32;
                    let scale_y = CANVAS_H / rect.height() as f32;
                    let x = (touch.client_x() as f32 - rect.left() as f32) * scale_x;
                    let y = (touch.client_y() as f32 - rect.top() as f32) * scale_y;
                    clicks.push(device_to_world(x, y));
                }
            });
            let _ = canvas
                .add_event_listener_with_callback("touchstart", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_game::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use std::cell::RefCell;
    use std::rc::Rc;

    use buckshot_duel::assets::AssetStore;
    use buckshot_duel::scene::Scene;
    use buckshot_duel::session::{ClickQueue, GameSession};
    use buckshot_duel::settings::Settings;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    env_logger::init();
    log::info!("Buckshot Duel (native) starting...");
    log::info!("Run with `trunk serve` for the web version");

    // headless duel as a smoke test; animations resolve instantly
    let scene = Rc::new(RefCell::new(Scene::new()));
    let assets = Rc::new(RefCell::new(AssetStore::new()));
    let seed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    let mut session = GameSession::new(
        scene,
        assets,
        ClickQueue::new(),
        &Settings::load(),
        Pcg32::seed_from_u64(seed),
    );
    let winner = pollster::block_on(session.run());
    println!("Headless duel finished, winner: {winner:?}");
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

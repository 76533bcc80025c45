use dioxus::prelude::*;

/// A full-screen overlay that centers its children in a modal card.
/// Clicking outside the card triggers `on_close`.
#[component]
pub fn ModalOverlay(on_close: EventHandler<()>, children: Element) -> Element {
    rsx! {
        div {
            style: "position: fixed; inset: 0; display: flex; align-items: center; justify-content: center; background: rgba(0,0,0,0.3); z-index: 2000;",
            onclick: move |_| on_close.call(()),
            div {
                style: "background: #fff; border-radius: 8px; box-shadow: 0 10px 30px rgba(0,0,0,0.2); max-width: 28rem; width: 100%; margin: 0 1rem; padding: 1.5rem;",
                onclick: move |evt: Event<MouseData>| evt.stop_propagation(),
                {children}
            }
        }
    }
}

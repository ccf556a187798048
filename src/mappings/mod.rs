pub mod key_name_to_x11_keycode;

pub use key_name_to_x11_keycode::X11Keycodes;

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Смещение между кодами evdev и кодами клавиш X11
const X11_KEYCODE_OFFSET: u16 = 8;

/// Имена клавиш и их evdev коды; код X11 получается прибавлением смещения
static KEY_NAME_TO_EVDEV: Lazy<HashMap<&'static str, u16>> = Lazy::new(|| {
    let mut map = HashMap::new();

    // Буквенные клавиши
    map.insert("a", 30);
    map.insert("b", 48);
    map.insert("c", 46);
    map.insert("d", 32);
    map.insert("e", 18);
    map.insert("f", 33);
    map.insert("g", 34);
    map.insert("h", 35);
    map.insert("i", 23);
    map.insert("j", 36);
    map.insert("k", 37);
    map.insert("l", 38);
    map.insert("m", 50);
    map.insert("n", 49);
    map.insert("o", 24);
    map.insert("p", 25);
    map.insert("q", 16);
    map.insert("r", 19);
    map.insert("s", 31);
    map.insert("t", 20);
    map.insert("u", 22);
    map.insert("v", 47);
    map.insert("w", 17);
    map.insert("x", 45);
    map.insert("y", 21);
    map.insert("z", 44);

    // Цифровые клавиши (верхний ряд)
    map.insert("1", 2);
    map.insert("2", 3);
    map.insert("3", 4);
    map.insert("4", 5);
    map.insert("5", 6);
    map.insert("6", 7);
    map.insert("7", 8);
    map.insert("8", 9);
    map.insert("9", 10);
    map.insert("0", 11);

    // Функциональные клавиши
    map.insert("f1", 59);
    map.insert("f2", 60);
    map.insert("f3", 61);
    map.insert("f4", 62);
    map.insert("f5", 63);
    map.insert("f6", 64);
    map.insert("f7", 65);
    map.insert("f8", 66);
    map.insert("f9", 67);
    map.insert("f10", 68);
    map.insert("f11", 87);
    map.insert("f12", 88);

    // Специальные клавиши
    map.insert("escape", 1);
    map.insert("tab", 15);
    map.insert("enter", 28);
    map.insert("space", 57);
    map.insert("scrolllock", 70);
    map.insert("printscreen", 99);
    map.insert("home", 102);
    map.insert("pageup", 104);
    map.insert("end", 107);
    map.insert("pagedown", 109);
    map.insert("insert", 110);
    map.insert("delete", 111);
    map.insert("pause", 119);

    // Цифровой блок
    map.insert("kpmultiply", 55);
    map.insert("kp7", 71);
    map.insert("kp8", 72);
    map.insert("kp9", 73);
    map.insert("kpsubtract", 74);
    map.insert("kp4", 75);
    map.insert("kp5", 76);
    map.insert("kp6", 77);
    map.insert("kpadd", 78);
    map.insert("kp1", 79);
    map.insert("kp2", 80);
    map.insert("kp3", 81);
    map.insert("kp0", 82);
    map.insert("kpdecimal", 83);
    map.insert("kpenter", 96);
    map.insert("kpdivide", 98);

    map
});

static X11_KEYCODE_TO_NAME: Lazy<HashMap<u8, &'static str>> = Lazy::new(|| {
    KEY_NAME_TO_EVDEV
        .iter()
        .map(|(&name, &code)| ((code + X11_KEYCODE_OFFSET) as u8, name))
        .collect()
});

/// Преобразование имён клавиш в коды X11
pub struct X11Keycodes;

impl X11Keycodes {
    /// Получить код X11 по имени клавиши (без учёта регистра)
    pub fn translate(key_name: &str) -> Result<u8, String> {
        let normalized = key_name.trim().to_lowercase();
        KEY_NAME_TO_EVDEV
            .get(normalized.as_str())
            .map(|&code| (code + X11_KEYCODE_OFFSET) as u8)
            .ok_or_else(|| format!("Unknown key: {}", key_name))
    }

    /// Получить имя клавиши по коду X11
    pub fn reverse_translate(keycode: u8) -> Option<&'static str> {
        X11_KEYCODE_TO_NAME.get(&keycode).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_keys() {
        assert_eq!(X11Keycodes::translate("f2").unwrap(), 68);
        assert_eq!(X11Keycodes::translate("f3").unwrap(), 69);
        assert_eq!(X11Keycodes::translate("f9").unwrap(), 75);
        assert_eq!(X11Keycodes::translate("f10").unwrap(), 76);
        assert_eq!(X11Keycodes::translate("f12").unwrap(), 96);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(X11Keycodes::translate("F3").unwrap(), 69);
        assert_eq!(X11Keycodes::translate(" KP0 ").unwrap(), 90);
    }

    #[test]
    fn test_reverse_mapping() {
        assert_eq!(X11Keycodes::reverse_translate(38), Some("a"));
        assert_eq!(X11Keycodes::reverse_translate(82), Some("kpsubtract"));
        assert_eq!(X11Keycodes::reverse_translate(8), None);
    }

    #[test]
    fn test_invalid_key() {
        assert!(X11Keycodes::translate("hyper_x").is_err());
    }
}

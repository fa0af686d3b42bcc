use std::path::Path;

pub fn run(path: &Path) {
    let game = texsort_identify::identify(path);
    println!("title:      {}", game.title.as_deref().unwrap_or("unknown"));
    match &game.serial {
        Some(serial) => println!("serial:     {serial} ({})", serial.region()),
        None => println!("serial:     none"),
    }
    println!("confidence: {}", game.confidence);
}

use marionette_service::mechanism::password::hash_password;

/// Prints an htpasswd line for `basic-credential`: `hash_password <user> <password>`.
fn main() {
    let mut args = std::env::args().skip(1);
    let (Some(user), Some(password)) = (args.next(), args.next()) else {
        eprintln!("usage: hash_password <user> <password>");
        std::process::exit(2);
    };

    match hash_password(&password) {
        Ok(hash) => {
            println!("{user}:{hash}");
        }
        Err(err) => {
            eprintln!("Failed to hash password: {err}");
            std::process::exit(1);
        }
    }
}

use std::env;

use windows_catalog::CatalogTrustList;

fn main() {
    // Use: demo <file>
    // Example: demo 'nv_disp.cat'
    let path = env::args().nth(1).expect("usage: demo <file>");
    let file = std::fs::File::open(&path).expect("error: couldn't open file");

    let ctl = if path.ends_with(".cat") || path.ends_with(".der") {
        CatalogTrustList::from_der(file).expect("failed to load catalog")
    } else {
        panic!("unexpected input (expected .cat or .der): {}", path);
    };

    for member in ctl.members() {
        println!("{:?}", member.tag_name());
        for attr in member.attributes() {
            println!("\t {}", attr.oid);
        }
    }

    for entry in ctl.entries().expect("failed to resolve members") {
        println!("{entry}");
    }
}

//! Parser throughput over representative PTY output.

use core_color::ColorScheme;
use core_config::ParserConfig;
use core_events::Signals;
use core_module::ModuleRegistry;
use core_parser::{Host, Vt};
use core_screen::Screen;
use criterion::{Criterion, black_box, criterion_group, criterion_main};

fn sample_stream() -> Vec<u8> {
    let mut bytes = Vec::new();
    for i in 0..200 {
        bytes.extend_from_slice(format!("\x1b[{};1H\x1b[1;3{}m", i % 24 + 1, i % 8).as_bytes());
        bytes.extend_from_slice(b"the quick brown fox jumps over the lazy dog\x1b[m\r\n");
    }
    bytes
}

fn parser_throughput(c: &mut Criterion) {
    let stream = sample_stream();
    c.bench_function("advance_mixed_output", |b| {
        let mut screen = Screen::new(80, 24);
        let mut colors = ColorScheme::new();
        let mut signals = Signals::new();
        let mut modules = ModuleRegistry::new();
        let mut vt = Vt::new(&ParserConfig::default());
        b.iter(|| {
            let mut host = Host {
                screen: &mut screen,
                colors: &mut colors,
                signals: &mut signals,
                modules: &mut modules,
            };
            vt.advance(&mut host, black_box(&stream));
        });
    });
}

criterion_group!(benches, parser_throughput);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use emu_core::cpu_6502::{Cpu6502, RamBus};

/// Build a RAM image with a small instruction loop at $0600.
fn bench_memory() -> RamBus {
    let mut ram = RamBus::new();

    // LDA #$42 ; A9 42
    // STA $2000 ; 8D 00 20
    // LDX #$10 ; A2 10
    // LDY #$20 ; A0 20
    // INX ; E8
    // INY ; C8
    // DEX ; CA
    // DEY ; 88
    // ADC #$01 ; 69 01
    // JMP $0600 ; 4C 00 06 (loop back)
    ram.load_program(
        0x0600,
        &[
            0xA9, 0x42, 0x8D, 0x00, 0x20, 0xA2, 0x10, 0xA0, 0x20, 0xE8, 0xC8, 0xCA, 0x88, 0x69,
            0x01, 0x4C, 0x00, 0x06,
        ],
    );
    ram
}

fn fresh_cpu() -> Cpu6502<RamBus> {
    let mut cpu = Cpu6502::new(bench_memory()).expect("catalog builds");
    cpu.reset(0x0600, 0xFF);
    cpu
}

fn bench_cpu_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu_6502_step");

    group.bench_function("single_instruction", |b| {
        b.iter(|| {
            let mut cpu = fresh_cpu();
            cpu.step().unwrap();
            black_box(cpu.regs.a);
        });
    });

    group.finish();
}

fn bench_cpu_multiple_steps(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu_6502_multiple_steps");

    for step_count in [10, 100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(step_count),
            step_count,
            |b, &count| {
                b.iter(|| {
                    let mut cpu = fresh_cpu();
                    for _ in 0..count {
                        cpu.step().unwrap();
                    }
                    black_box(cpu.cycles);
                });
            },
        );
    }

    group.finish();
}

fn bench_cpu_reset(c: &mut Criterion) {
    c.bench_function("cpu_6502_reset", |b| {
        let mut cpu = fresh_cpu();
        b.iter(|| {
            cpu.reset(0x0600, 0xFF);
            black_box(cpu.regs.pc);
        });
    });
}

criterion_group!(
    benches,
    bench_cpu_step,
    bench_cpu_multiple_steps,
    bench_cpu_reset
);
criterion_main!(benches);

fn main() {
    let target = std::env::var("TARGET").unwrap_or_default();
    println!("cargo:rerun-if-changed=src/arch/context_switch.s");

    // The context switch / bootstrap primitives are Cortex-M4 assembly;
    // only compile and link them when actually targeting the MCU. Host
    // test builds (`cargo test`) never reference these symbols.
    if target.starts_with("thumbv7em") {
        cc::Build::new()
            .file("src/arch/context_switch.s")
            .compile("context_switch");
    }
}

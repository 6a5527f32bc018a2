#![no_main]

use jaguar_core::{
    decode_memory_region, resolve, validate_fetch_alignment, AccessWidth, Requester, SystemBus,
    MAIN_RAM_BYTES,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut bus = SystemBus::headless();
    bus.set_watchpoint(Some(0x1000));

    for op in data.chunks_exact(8) {
        let address = u32::from_be_bytes([op[0], op[1], op[2], op[3]]);
        let value = u32::from_be_bytes([op[4], op[5], op[6], op[7]]);
        let who = Requester::ALL[usize::from(op[0]) % Requester::COUNT];

        let _ = decode_memory_region(address);
        let _ = validate_fetch_alignment(address);
        match op[7] % 6 {
            0 => {
                let _ = bus.read_byte(address, who);
            }
            1 => {
                let _ = bus.read_word(address, who);
            }
            2 => {
                let _ = bus.read_long(address, who);
            }
            3 => bus.write_byte(address, value.to_be_bytes()[3], who),
            4 => {
                let [_, _, high, low] = value.to_be_bytes();
                bus.write_word(address, u16::from_be_bytes([high, low]), who);
            }
            _ => bus.write_long(address, value, who),
        }

        for width in [AccessWidth::Byte, AccessWidth::Word] {
            if let Some(resolved) = resolve(address, width) {
                assert!(resolved.descriptor.region.contains(resolved.address));
            }
        }
    }

    assert_eq!(bus.main_ram().len(), MAIN_RAM_BYTES);
});

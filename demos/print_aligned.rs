use codegen_link::serializer::serialize_aligned_record;
use codegen_link::{AsmParser, Correlator, Decoder, IrInfo, ParseOptions};

const SOURCE: &str = "int add(int a, int b)\n{\n  return a + b;\n}\n";

const IR: &str = r#"{"name":"add","bbs":[{"name":"entry","insts":[{"line":3,"opcode":"add"},{"line":3,"opcode":"ret"}]}]}"#;

const ARM: &str = "00000000 <add>:
add():
/src/add.c:3
   0:\te0800001 \tadd\tr0, r0, r1
   4:\te12fff1e \tbx\tlr
";

const X86: &str = "00000000 <add>:
add():
/src/add.c:3
   0:\t8b 44 24 08          \tmovl   0x8(%esp), %eax
   4:\t03 44 24 04          \taddl   0x4(%esp), %eax
   8:\tc3                   \tretl
";

fn main() {
    let options = ParseOptions::default();
    let ir = IrInfo::parse_str(IR).unwrap();
    let arm = AsmParser::new(Decoder::Columns, &options)
        .unwrap()
        .parse_str(ARM)
        .unwrap();
    let x86 = AsmParser::new(Decoder::Combined, &options)
        .unwrap()
        .parse_str(X86)
        .unwrap();

    let correlator = Correlator::new(
        SOURCE,
        &ir.line_index,
        &ir.line_index,
        &arm.line_index,
        &x86.line_index,
    );
    for record in correlator.records() {
        let v = serialize_aligned_record("add.c", &record);
        eprintln!("{}", serde_json::to_string_pretty(&v).unwrap());
    }
}

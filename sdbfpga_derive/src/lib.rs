use proc_macro::TokenStream;
use quote::quote;
use syn::{parse, parse_macro_input, DeriveInput};

#[proc_macro_derive(RegisterSerde)]
/// Derived on a packed_struct to shim in the register serde methods used by the transports
pub fn derive_register_serde(tokens: TokenStream) -> TokenStream {
    let input = parse_macro_input!(tokens as DeriveInput);
    let reg_name = input.ident;
    let generated = quote! {
        impl Serialize for #reg_name {
            type Chunk = <Self as PackedStruct>::ByteArray;

            fn serialize(&self) -> Self::Chunk {
                self.pack().expect("Packing failed, this shouldn't happen")
            }
        }

        impl Deserialize for #reg_name {
            type Chunk = <Self as PackedStruct>::ByteArray;

            fn deserialize(chunk: Self::Chunk) -> TransportResult<Self> {
                Ok(Self::unpack(&chunk)?)
            }
        }
    };
    TokenStream::from(generated)
}

#[proc_macro_attribute]
/// Attach the byte offset of a register within its core, as in `#[offset(0x4)]`
pub fn offset(attr: TokenStream, item: TokenStream) -> TokenStream {
    let num = match parse::<syn::Lit>(attr).expect("Error parsing attribute") {
        syn::Lit::Int(v) => v,
        _ => panic!("The offset must be a literal integer"),
    };
    let item = parse_macro_input!(item as DeriveInput);
    let ident = item.clone().ident;

    let generated = quote! {
        impl RegisterOffset for #ident {
            const OFFSET: u32 = #num;
        }
        #item
    };
    TokenStream::from(generated)
}

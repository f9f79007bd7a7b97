// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Pre-generated 1024-bit primes for tests.
//!
//! Generating fresh primes takes long enough to dominate protocol test time,
//! so tests assemble Paillier moduli from this pool instead. These primes are
//! public and must never be used outside of tests.

/// Hex-encoded 1024-bit primes.
pub(crate) const TEST_PRIMES_1024: &[&str] = &[
    "de107d0f81844d56a580f88b0f74997082931dad27ba17547d5207e74989e3c2cee02551929342d63d34bffd22c48fb3232d6747b564910f723084b9064eb58359545a48ba71561d194a80726412c985a955f0cfb1c61a0cb44a8b7a927fa6e409d9bbb39092d249412febc14d9a4e9758a5102dc831b12f3cbd9da63783f26f",
    "c181abae506ff91a7cce01587a8d987a2d145228723fc31a19815fafab37a2f504c19cb535f9ff90d5c17137d206f1a92a9b50291b681ea1b963278734c13e403686d94f62806aa7fbf32054e9719788f706a283b2a6fe0e1de6030dd73ade777be3b23c4376941fd603695c79e3ce7824024eba84285a37e9a4e9a99cffee9d",
    "cca1a765399bd098c6dbbc3d66a2448a05bc533fc53e025a1fff1deffb6c762ce64e2dc3d2e4b96a43c07a92b58422e2b01f636c154ae55b4a1f86c0724f8483efa48343e3cf38e5775edad2b80c15eac22445b39c6d8a997e61912418bb6a4879b86b09012069ab3ef60b00e5b0ec005dbb4c4bcdef6c2f8b6380271d123909",
    "bb0dc29191ec2ae72d4b0005935f5c8f52bf64eaccb5279a39b6448602894f3073690883afad465f843bd410cf9b1f578411d029856c60959ddffeaf3239ecf0e723195b42b9f73a7f25db57660d9cf17e47824f981c720c302a9e2ec0f40f55913c25cf2a3937bf2f5d431f0838f58cc89b6f3c6b5cd25a9aa0259d4301b51d",
    "f387eccdcfa490305bce07958c0b72da098bc9f5b93edab71cede961a05842b7580864b06259cea45285a05bb5a304da6713e43c86c8ee7525befe31f6eeea28356ef17cb15e326cf8e3d468f57682ff52356c186d3b4f0fbd7c8cfb9a8662071bb700c3406d2c0e7a7101c04dff0418166e1a9c9b6f9245ea50d556d366ffed",
    "a0d07a12b1cf44f0efc48079b3754053407ac030ab803994d9d47514564abed46b115349f033f744a781ac42d9729ca4031b38e322b17b3e4890b35eec0aaa3949017e31442e98107e117cb1aa6f07320322576decf63d267605948f52cf501fd51419ac3087525e6ba67842aa2f915323ded2d5a80bf8c4ffa4b3bf638100df",
    "9027984ddaa0792e30b04f72e7c5ffd33dc9b3212fc0e667e5f2236b384b0ad0e6f6a70ffd5535bc95c14a54ed9b1bc4ceceab52a00f30007594dfc5aed558aa5d015002a1a7a34d400e3aedda4578f2982666e7e3fe92ea240c9216b59c42877a6f05d5fa32e6a1e8baf1094034650098f7687ef7c4dcab623ccd27d9331f49",
    "829753a10de7c6814e32d6157c54a18cc8ce96305e6c7cddc615ddcccb5125d0cfca441e9fc04fe76005854929fc7af2a25d39d49049cbe4e1c82f1502870b684fdc5d805f13abbba0345e614efb5d92902c5da4caf0404dba9e979fc2dfa6d38cd8530dda7fb2eb03f679450b2ee24788e8f79ca090e7e9c7f607d4f1089ab7",
    "961f0d6b133cebb36a99a90ffa7a871e618625697acdfffdc87aa57ce3dbf6f74cbecca0e809f9fbae3754990f618666a15a2eb9ece5bbfef26514e49922332acaf7e5b4b7806f88c6686d8a329be8c80c66eec27ebc9fd7fe20e20e322105a1209b46fcb68ed3ee0254dad9ee81dfd0dc61bb584f09a54db84552a9d233ec2f",
    "e981c61eed759368619693f64914e36b4dc9e6dfeb2c70b5f5d74ed3629ab755431b3b54334cc5edf66d34bb60153f555e9a776f54e5055ea6b197f37a5ce9e212c97f4003e536a663dc236dfd3b29b74d2629fe0e482e9b23d4b7c02a4d6ed2ab2e53d75b9bd485571c819a8f559df97df8014d93f866de378d03bdd075bdbb",
    "a315f8e1bb99a0db0f6f7a4a582cc611979ecaf6efd0624270a71e0de70120a5bc5065500c147f89a0835e131eb9ad5e36bce7282508f0126cdfd714da5e1692b7c2092c887b40f48803c9b8da704c550b9b19754b18550748c7b2b8c56c5069afcca75fd113a67f0b643c770995798ac6cf5ad7305e5d3e01ad080253a1c473",
    "e61a27202564f5b871bee1547d09ec6b16d15fc2ee26a8be399d0f7ce2b7fd126ed413f778ab9a83732dc0f939ba6823765e7c18f34d75dcb0ea61962ea1ddad553c2c3dda6923ea8ce35cc28d11d01ef0b756910cf6869a36cc6349b21abb1511374d8f5903ca8010059464cfd30ffc13d9da5ea5f4641cc105630663c23035",
    "a970f52b89b109c1d3525425494c8bc0faab3deb1d25bc0c7a33da50d49dc35a456cf86e623036aa0e17df4bac1f623752cb2fcdf268c96ad410e509467e2c0730fe6bd2c14a7206eb61a5d792f9ab260b20ae33dafe853b52e3757a2ef3ec89fae9e30870f6395511488c68059d1337f8d04c577000dfb83619c1f89a7ace33",
    "fe15379faa95e91e83cd912eaf74a38e18559a6b6143323c589d5b4ba09d559fa7c1a019a40b2161900a53227fd6b8427e1c9af8ba01a4ec75d8ab35ef8e14eda4f2755a856cd9fdc2b10f5be529f40bf42e7f5b9b6f47590a6607be088b8188bff1052eba328e6d747e6b75a9ea13c3c98f008cd7fc67412d86712af5db9f3f",
    "f792d8d8135a4e4a4fe5b29eb881e5b83fc575f528ac2bb6662f94a0fe23c7f29c4d646867a59c5bb0386df6f3b69138e3d6679fe6c96342a9d791d7502012083f3ce597881500721b6dd6b15f22d9df41faa69105a404651b26801f823de1f9033e3fad40d3917a2e59de630445d01547fba2d8cf55f4bed787ba680a9eb4c5",
    "ade23e54706e8b8527d1feea22e96f11454c95f30393c5270924b515dc75664e0ba1db830cb93180d2e0054a5ad008bc3eef409b24d2f76da5ade00e56585eaea3b396ef944b688137db77a6b5a378883e5ee5ea5c4bc964b429ad8cf4a747e87607a80f6c0e2309aedd42d55929ede3ac82092b62b0e5e5536ec2b93300cb9f",
    "bcbeb29cbf17349c899d72193d65c7417e599ff662ab5c60abf004827035d8b3569b5495c1d11b337d0f2dc89b0691f1fdb586df2c975fec9fae3bba62bed43d72f6f9a558017e3570e7f5d44646068084a6502d6a2cfb500d00b73d38a89a15825048875bfe95ae636d7ad60b42d6365825791d565debf0164cc723a7e1f427",
    "d78e68cceba994c1719ee2cc6e940f1fa51e1243f1c45abe7dfdea7a705be9d574954574e7a2687e19d9be6157e9ebca57c65cf17f8c596725177f3ed82fab1f4835e972e39813147a743a8c3b06458e55666f2bd28a1db71acb642a12ce355b2e9a93ad322132018b36f138c8ec453d712af4b18a000150c87daa95daf2fb59",
    "c04a77585f840d0d76e20699599998bc7d3cff62491ffc3e25059622f7a0956f448aa01b348248004569e1db735f6fc47c9c4a111fb1d0a9d7e140cef7e5bb86d1dc3cc6445a9839385f7c2c19e0c83f53bfdc6a7cac2c2c5f5edc3d52502bc32bae00db4134d7c394680cf3dd5786fa885cdb73f233793d15c584a26cf301ed",
    "f3336fb763d78addc313f08d4bed41f9f821bfa71651f5d9e700d5342a4b8603ab7d1062fad2ac818ed6220cd3441f9d7d2af8e2dd52e5d0a7562abe1dcde21b341d3c300c5215ea4777de30601d1a6609e254462419d97342772d29941d308552375d83a05d95ba9c6e48df72d6cfb8dd793dd5a94c2074a742459126fdca43",
    "9d8dbebc191979d8235a9af9a0ada5fbb72e98aa248c63f99d3ded05c43da59a2f896653a8add9b665437fe2c9ab505cc3a56a3d93a719b86f0a14041c0bb6d55544dabd6930af44fd12484cb1161f54ba8287e8f1ea09bfade8bdf067c416b26bbb897204ef48cdf99fc6230db354fc4b210d2ba7401d32643a9fc2d24e6907",
    "b41121f505b1dad464d741e0bd5231e1ad226487ed4eedce09909337140e43dbbb937bb58d8b9d07b5f60c884bfc8e609990b413dd9b7914948049a3702973a213ede207b7013e10816342cf46c358358ea859695cec7ad1b20f7be57d0d447cb49ab5db482737be7c3c88972084cd661d9b4e290b298a9e06e95da90333d61b",
    "ee09f150707bbf8b07773798f85889c6900dcf79d110152b51a0ef43c729b8fa98c56b7210b651a06abd89a5b2154e84fa041fb21214c945b718223b74cd26871b484da0dc87fc184d03ee39e619858376aafa49e46d5c7ee70f9e0e4221bd609f3ad5900920bba3a0727684b41f7e6f6b2fb3dc29cb14da65e6dc8f932bb911",
    "b4bc7fb8ce2e67b505d54d6b66175015bfbf62038c7fdad859a62b7cd481fb15e3fd8f0223f56a24193a91c2892a8397c8c034cfa3cdea964d14da3af468c921c527864fc66bb14a34b9c753dcb2286be4d024d7097fb160d09f8ff241bc52d73953fb59d0e23b472a7a9d85296c866f022f8d203f06eff5c6e32161453ac063",
];
